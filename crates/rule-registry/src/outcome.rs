//! 规则评估结果

use serde::{Deserialize, Serialize};

/// 单条规则的评估结果，通过或失败各自携带负载
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "snake_case")]
pub enum Outcome<P, F> {
    Pass(P),
    Fail(F),
}

impl<P, F> Outcome<P, F> {
    pub fn is_pass(&self) -> bool {
        matches!(self, Outcome::Pass(_))
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Outcome::Fail(_))
    }

    pub fn pass_payload(&self) -> Option<&P> {
        match self {
            Outcome::Pass(payload) => Some(payload),
            Outcome::Fail(_) => None,
        }
    }

    pub fn fail_payload(&self) -> Option<&F> {
        match self {
            Outcome::Pass(_) => None,
            Outcome::Fail(payload) => Some(payload),
        }
    }

    pub fn map_pass<Q>(self, f: impl FnOnce(P) -> Q) -> Outcome<Q, F> {
        match self {
            Outcome::Pass(payload) => Outcome::Pass(f(payload)),
            Outcome::Fail(payload) => Outcome::Fail(payload),
        }
    }

    pub fn map_fail<G>(self, f: impl FnOnce(F) -> G) -> Outcome<P, G> {
        match self {
            Outcome::Pass(payload) => Outcome::Pass(payload),
            Outcome::Fail(payload) => Outcome::Fail(f(payload)),
        }
    }

    /// 指标标签
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Outcome::Pass(_) => "pass",
            Outcome::Fail(_) => "fail",
        }
    }
}
