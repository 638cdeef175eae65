use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{BaseChallengeWidget, ChallengeWidgetFactory};
use crate::domains::auth::types::ChallengeToken;

/// Invisible challenge that answers with a pre-issued token.
///
/// Used where no interactive challenge can be rendered (terminal, tests
/// against provider test numbers).
pub struct ConfiguredChallengeWidget {
    token: Option<String>,
}

#[async_trait]
impl BaseChallengeWidget for ConfiguredChallengeWidget {
    async fn solve(&self) -> Result<ChallengeToken> {
        match &self.token {
            Some(token) if !token.is_empty() => Ok(ChallengeToken::new(token.clone())),
            _ => Err(anyhow!("no challenge token configured (set RECAPTCHA_TOKEN)")),
        }
    }
}

pub struct ConfiguredChallengeFactory {
    token: Option<String>,
}

impl ConfiguredChallengeFactory {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl ChallengeWidgetFactory for ConfiguredChallengeFactory {
    fn create(&self) -> Result<Arc<dyn BaseChallengeWidget>> {
        Ok(Arc::new(ConfiguredChallengeWidget {
            token: self.token.clone(),
        }))
    }
}
