use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The ten developmental domains every score, stat and alert refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    ExecutiveFunctions,
    LanguageCommunication,
    FineMotor,
    GrossMotor,
    SocialEmotional,
    CognitiveReasoning,
    AttentionRegulation,
    SensoryProcessing,
    SelfCare,
    CreativeExpression,
}

pub const DOMAIN_COUNT: usize = 10;

impl Domain {
    pub const ALL: [Domain; DOMAIN_COUNT] = [
        Domain::ExecutiveFunctions,
        Domain::LanguageCommunication,
        Domain::FineMotor,
        Domain::GrossMotor,
        Domain::SocialEmotional,
        Domain::CognitiveReasoning,
        Domain::AttentionRegulation,
        Domain::SensoryProcessing,
        Domain::SelfCare,
        Domain::CreativeExpression,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Domain::ExecutiveFunctions => "executive_functions",
            Domain::LanguageCommunication => "language_communication",
            Domain::FineMotor => "fine_motor",
            Domain::GrossMotor => "gross_motor",
            Domain::SocialEmotional => "social_emotional",
            Domain::CognitiveReasoning => "cognitive_reasoning",
            Domain::AttentionRegulation => "attention_regulation",
            Domain::SensoryProcessing => "sensory_processing",
            Domain::SelfCare => "self_care",
            Domain::CreativeExpression => "creative_expression",
        }
    }

    /// Position of the domain in profile arrays.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Domain {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Domain::ALL
            .iter()
            .copied()
            .find(|domain| domain.code() == value.trim())
            .ok_or_else(|| EngineError::UnknownDomain(value.to_string()))
    }
}

/// A fixed-size value per domain, indexed by [`Domain`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainMap<T>([T; DOMAIN_COUNT]);

impl<T: Copy> DomainMap<T> {
    pub fn filled(value: T) -> Self {
        Self([value; DOMAIN_COUNT])
    }

    pub fn get(&self, domain: Domain) -> T {
        self.0[domain.index()]
    }

    pub fn set(&mut self, domain: Domain, value: T) {
        self.0[domain.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Domain, T)> + '_ {
        Domain::ALL.iter().map(move |domain| (*domain, self.get(*domain)))
    }
}

impl<T: Copy + Default> Default for DomainMap<T> {
    fn default() -> Self {
        Self::filled(T::default())
    }
}
