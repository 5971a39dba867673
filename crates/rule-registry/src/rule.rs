//! 规则变体
//!
//! 注册中心与评估管道只依赖 [`Rule`] 这一个能力，不区分规则的具体来源。

use crate::compiler::CompiledPredicate;
use crate::error::Result;
use crate::outcome::Outcome;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// 可执行规则：对 `T` 的实例求值并给出通过或失败结果
pub trait Rule<T, P, F>: Send + Sync {
    fn evaluate(&self, instance: &T) -> Result<Outcome<P, F>>;

    /// 展示用名称
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// 共享的规则实例可以同时注册到多个分组
impl<T, P, F, R> Rule<T, P, F> for Arc<R>
where
    R: Rule<T, P, F> + ?Sized,
{
    fn evaluate(&self, instance: &T) -> Result<Outcome<P, F>> {
        (**self).evaluate(instance)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

type Predicate<T> = Arc<dyn Fn(&T) -> Result<bool> + Send + Sync>;
type Evaluation<T, P, F> = Arc<dyn Fn(&T) -> Result<Outcome<P, F>> + Send + Sync>;

/// 谓词规则：谓词为真时返回固定的通过载荷，否则返回固定的失败载荷
pub struct FuncRule<T, P, F> {
    predicate: Predicate<T>,
    pass: P,
    fail: F,
}

impl<T, P, F> FuncRule<T, P, F> {
    pub fn new<G>(predicate: G, pass: P, fail: F) -> Self
    where
        G: Fn(&T) -> Result<bool> + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            pass,
            fail,
        }
    }

    pub fn pass_payload(&self) -> &P {
        &self.pass
    }

    pub fn fail_payload(&self) -> &F {
        &self.fail
    }
}

impl<T, P, F> FuncRule<T, P, F>
where
    T: Serialize + 'static,
{
    /// 由编译后的公式构造
    pub fn compiled(predicate: CompiledPredicate<T>, pass: P, fail: F) -> Self {
        Self::new(move |instance: &T| predicate.evaluate(instance), pass, fail)
    }
}

impl<T, P, F> Rule<T, P, F> for FuncRule<T, P, F>
where
    P: Clone + Send + Sync,
    F: Clone + Send + Sync,
{
    fn evaluate(&self, instance: &T) -> Result<Outcome<P, F>> {
        if (self.predicate)(instance)? {
            Ok(Outcome::Pass(self.pass.clone()))
        } else {
            Ok(Outcome::Fail(self.fail.clone()))
        }
    }
}

impl<T, P: fmt::Debug, F: fmt::Debug> fmt::Debug for FuncRule<T, P, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FuncRule")
            .field("pass", &self.pass)
            .field("fail", &self.fail)
            .finish_non_exhaustive()
    }
}

/// 模板规则：每次求值完全交给调用方提供的逻辑，载荷由逻辑自行决定
pub struct TemplateRule<T, P, F> {
    name: String,
    evaluation: Evaluation<T, P, F>,
}

impl<T, P, F> TemplateRule<T, P, F> {
    pub fn new<G>(name: impl Into<String>, evaluation: G) -> Self
    where
        G: Fn(&T) -> Result<Outcome<P, F>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            evaluation: Arc::new(evaluation),
        }
    }
}

impl<T, P, F> Rule<T, P, F> for TemplateRule<T, P, F> {
    fn evaluate(&self, instance: &T) -> Result<Outcome<P, F>> {
        (self.evaluation)(instance)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<T, P, F> fmt::Debug for TemplateRule<T, P, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
