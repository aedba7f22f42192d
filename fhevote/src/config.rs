use crate::*;
use std::env::var;
use std::str::FromStr;

pub const ENV_VARIANT: &str = "FHEVOTE_VARIANT";
pub const ENV_CANDIDATE_COUNT: &str = "FHEVOTE_CANDIDATE_COUNT";
pub const ENV_MAX_VOTE_CHOICES: &str = "FHEVOTE_MAX_VOTE_CHOICES";
pub const ENV_VOTE_POINTS: &str = "FHEVOTE_VOTE_POINTS";

/// Construction parameters of an election.
///
/// Parameters are validated once, by [`ElectionConfig::build`]; the resulting
/// tally is immutable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ElectionConfig {
    Binary,
    MultiCandidate {
        candidate_count: u32,
    },
    Ranked {
        candidate_count: u32,
        max_vote_choices: u32,
        vote_points: Vec<u32>,
    },
}

impl ElectionConfig {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read the configuration from `FHEVOTE_*` environment variables.
    ///
    /// `FHEVOTE_VARIANT` defaults to `binary`. `FHEVOTE_VOTE_POINTS` is a comma
    /// separated list; `FHEVOTE_MAX_VOTE_CHOICES` defaults to its length.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let variant = lookup(ENV_VARIANT).unwrap_or_else(|| "binary".to_owned());

        match variant.trim() {
            "binary" => Ok(ElectionConfig::Binary),
            "multi_candidate" => Ok(ElectionConfig::MultiCandidate {
                candidate_count: required(&lookup, ENV_CANDIDATE_COUNT)?,
            }),
            "ranked" => {
                let candidate_count = required(&lookup, ENV_CANDIDATE_COUNT)?;
                let vote_points = lookup(ENV_VOTE_POINTS)
                    .ok_or(ConfigError::MissingEnv(ENV_VOTE_POINTS))?
                    .split(',')
                    .map(|points| parse(ENV_VOTE_POINTS, points))
                    .collect::<Result<Vec<u32>, ConfigError>>()?;
                let max_vote_choices = match lookup(ENV_MAX_VOTE_CHOICES) {
                    Some(value) => parse(ENV_MAX_VOTE_CHOICES, &value)?,
                    None => vote_points.len() as u32,
                };

                Ok(ElectionConfig::Ranked {
                    candidate_count,
                    max_vote_choices,
                    vote_points,
                })
            }
            other => Err(ConfigError::UnknownVariant(other.to_owned())),
        }
    }

    /// Validate the parameters and build the tally variant
    pub fn build(&self) -> Result<AnyTally, ConfigError> {
        match self {
            ElectionConfig::Binary => Ok(AnyTally::Binary(BinaryTally)),
            ElectionConfig::MultiCandidate { candidate_count } => Ok(AnyTally::MultiCandidate(
                MultiCandidateTally::new(*candidate_count)?,
            )),
            ElectionConfig::Ranked {
                candidate_count,
                max_vote_choices,
                vote_points,
            } => Ok(AnyTally::Ranked(RankedTally::new(
                *candidate_count,
                *max_vote_choices,
                vote_points.clone(),
            )?)),
        }
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::BadEnvValue {
        key,
        value: value.to_owned(),
    })
}

fn required<F, T>(lookup: &F, key: &'static str) -> Result<T, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
    T: FromStr,
{
    let value = lookup(key).ok_or(ConfigError::MissingEnv(key))?;
    parse(key, &value)
}
