//! Application-level configuration loading, including the built-in question bank.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_RUSH_BACK_CONFIG_PATH";
/// Pause shown to players between answering and the next question.
const DEFAULT_ADVANCE_DELAY_MS: u64 = 1_000;
/// Grace period before the single profile-creation attempt after signup.
const DEFAULT_PROFILE_GRACE_MS: u64 = 1_000;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    advance_delay: Duration,
    profile_grace_delay: Duration,
    questions: Vec<QuestionSeed>,
}

/// One entry of the seedable question bank.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionSeed {
    /// Question text.
    pub question: String,
    /// Ordered answer options.
    pub options: Vec<String>,
    /// The correct option; must appear in `options`.
    pub correct_answer: String,
    /// Question category.
    pub category: String,
    /// Question difficulty.
    pub difficulty: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        questions = config.questions.len(),
                        "loaded configuration from file"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Configuration with explicit delays and an empty question bank, for tests.
    pub fn with_delays(advance_delay: Duration, profile_grace_delay: Duration) -> Self {
        Self {
            advance_delay,
            profile_grace_delay,
            questions: Vec::new(),
        }
    }

    /// Pause between an answer being recorded and the next question.
    pub fn advance_delay(&self) -> Duration {
        self.advance_delay
    }

    /// Grace period applied before the single post-signup profile insert.
    pub fn profile_grace_delay(&self) -> Duration {
        self.profile_grace_delay
    }

    /// Question bank to seed the store with at startup.
    pub fn question_bank(&self) -> &[QuestionSeed] {
        &self.questions
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            advance_delay: Duration::from_millis(DEFAULT_ADVANCE_DELAY_MS),
            profile_grace_delay: Duration::from_millis(DEFAULT_PROFILE_GRACE_MS),
            questions: default_question_bank(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    advance_delay_ms: Option<u64>,
    #[serde(default)]
    profile_grace_delay_ms: Option<u64>,
    #[serde(default)]
    questions: Vec<QuestionSeed>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            advance_delay: value
                .advance_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.advance_delay),
            profile_grace_delay: value
                .profile_grace_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.profile_grace_delay),
            questions: if value.questions.is_empty() {
                defaults.questions
            } else {
                value.questions
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn seed(
    question: &str,
    options: [&str; 4],
    correct: &str,
    category: &str,
    difficulty: &str,
) -> QuestionSeed {
    QuestionSeed {
        question: question.into(),
        options: options.iter().map(|option| option.to_string()).collect(),
        correct_answer: correct.into(),
        category: category.into(),
        difficulty: difficulty.into(),
    }
}

/// Built-in question bank shipped with the binary.
fn default_question_bank() -> Vec<QuestionSeed> {
    vec![
        seed(
            "What planet is known as the Red Planet?",
            ["Venus", "Mars", "Jupiter", "Mercury"],
            "Mars",
            "science",
            "easy",
        ),
        seed(
            "What gas do plants absorb from the atmosphere?",
            ["Oxygen", "Nitrogen", "Carbon dioxide", "Helium"],
            "Carbon dioxide",
            "science",
            "easy",
        ),
        seed(
            "Which ocean is the largest?",
            ["Atlantic", "Indian", "Arctic", "Pacific"],
            "Pacific",
            "geography",
            "easy",
        ),
        seed(
            "How many players are on a soccer team on the field?",
            ["9", "10", "11", "12"],
            "11",
            "sports",
            "easy",
        ),
        seed(
            "Which movie features the song 'Let It Go'?",
            ["Moana", "Frozen", "Tangled", "Brave"],
            "Frozen",
            "entertainment",
            "easy",
        ),
        seed(
            "What is the chemical symbol for gold?",
            ["Go", "Gd", "Au", "Ag"],
            "Au",
            "science",
            "medium",
        ),
        seed(
            "In which year did World War II end?",
            ["1943", "1944", "1945", "1946"],
            "1945",
            "history",
            "medium",
        ),
        seed(
            "What is the capital of Australia?",
            ["Sydney", "Melbourne", "Canberra", "Perth"],
            "Canberra",
            "geography",
            "medium",
        ),
        seed(
            "Which band released the album 'Abbey Road'?",
            ["The Rolling Stones", "The Beatles", "Pink Floyd", "Queen"],
            "The Beatles",
            "entertainment",
            "medium",
        ),
        seed(
            "How many Grand Slam tournaments are played in tennis each year?",
            ["3", "4", "5", "6"],
            "4",
            "sports",
            "medium",
        ),
        seed(
            "Which empire built Machu Picchu?",
            ["Aztec", "Maya", "Inca", "Olmec"],
            "Inca",
            "history",
            "medium",
        ),
        seed(
            "What particle carries a negative electric charge?",
            ["Proton", "Neutron", "Electron", "Photon"],
            "Electron",
            "science",
            "hard",
        ),
        seed(
            "Which treaty ended World War I?",
            [
                "Treaty of Versailles",
                "Treaty of Tordesillas",
                "Treaty of Ghent",
                "Treaty of Utrecht",
            ],
            "Treaty of Versailles",
            "history",
            "hard",
        ),
        seed(
            "Which country has the longest coastline in the world?",
            ["Russia", "Australia", "Canada", "Norway"],
            "Canada",
            "geography",
            "hard",
        ),
        seed(
            "Who directed the film '2001: A Space Odyssey'?",
            [
                "Steven Spielberg",
                "Stanley Kubrick",
                "Ridley Scott",
                "George Lucas",
            ],
            "Stanley Kubrick",
            "entertainment",
            "hard",
        ),
    ]
}
