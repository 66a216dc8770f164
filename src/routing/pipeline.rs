//! Ordered asynchronous step composition.
//!
//! # Responsibilities
//! - Run a list of steps over a value, each step consuming the previous result
//! - Stop at the first failing step and hand the failure to the caller
//! - Compose scope pipelines and a leaf handler into one dispatchable step
//!
//! # Design Decisions
//! - Steps are awaited one at a time; a request never has two steps in flight
//! - Pipelines are immutable once built and shared through `Arc`
//! - Generic over the carried value so the fold can be tested without a `Conn`

use futures_util::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::{ConfigError, DispatchError};

/// One unit of work in a pipeline: `T → deferred Result<T>`.
pub trait Step<T>: Send + Sync {
    fn call(&self, input: T) -> BoxFuture<'static, Result<T, DispatchError>>;
}

impl<T, F, Fut> Step<T> for F
where
    F: Fn(T) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, DispatchError>> + Send + 'static,
{
    fn call(&self, input: T) -> BoxFuture<'static, Result<T, DispatchError>> {
        Box::pin(self(input))
    }
}

/// Shared, type-erased step.
pub type BoxStep<T> = Arc<dyn Step<T>>;

/// Erase a closure or fn item into a [`BoxStep`].
pub fn step<T, F, Fut>(f: F) -> BoxStep<T>
where
    T: 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, DispatchError>> + Send + 'static,
{
    Arc::new(f)
}

/// A named, ordered list of steps.
pub struct Pipeline<T> {
    name: String,
    steps: Vec<BoxStep<T>>,
}

impl<T> fmt::Debug for Pipeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .finish()
    }
}

impl<T: Send + 'static> Pipeline<T> {
    /// Build a pipeline. Names must be non-empty and free of whitespace.
    pub fn new(name: impl Into<String>, steps: Vec<BoxStep<T>>) -> Result<Self, ConfigError> {
        let name = name.into();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidPipeline(name));
        }
        Ok(Self { name, steps })
    }

    /// Build a pipeline with a generated `pipeline_<uuid>` name.
    pub fn anonymous(steps: Vec<BoxStep<T>>) -> Self {
        Self {
            name: format!("pipeline_{}", uuid::Uuid::new_v4().simple()),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fold `input` through every step, left to right.
    pub async fn invoke(&self, input: T) -> Result<T, DispatchError> {
        let mut value = input;
        for (index, step) in self.steps.iter().enumerate() {
            tracing::trace!(pipeline = %self.name, step = index, "invoking pipeline step");
            value = step.call(value).await?;
        }
        Ok(value)
    }

    /// Compose `pipelines` (in order) followed by `handler` into one step.
    pub fn wrap(pipelines: Vec<Arc<Pipeline<T>>>, handler: BoxStep<T>) -> BoxStep<T> {
        Arc::new(Wrapped { pipelines, handler })
    }
}

struct Wrapped<T> {
    pipelines: Vec<Arc<Pipeline<T>>>,
    handler: BoxStep<T>,
}

impl<T: Send + 'static> Step<T> for Wrapped<T> {
    fn call(&self, input: T) -> BoxFuture<'static, Result<T, DispatchError>> {
        let pipelines = self.pipelines.clone();
        let handler = self.handler.clone();
        Box::pin(async move {
            let mut value = input;
            for pipeline in &pipelines {
                value = pipeline.invoke(value).await?;
            }
            handler.call(value).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn add(n: i64) -> BoxStep<i64> {
        step(move |x: i64| async move { Ok(x + n) })
    }

    fn mul(n: i64) -> BoxStep<i64> {
        step(move |x: i64| async move { Ok(x * n) })
    }

    #[test]
    fn test_pipeline_name() {
        let pipeline = Pipeline::<i64>::new("sample", vec![]).unwrap();
        assert_eq!(pipeline.name(), "sample");
        assert!(pipeline.is_empty());

        assert!(matches!(
            Pipeline::<i64>::new("", vec![]),
            Err(ConfigError::InvalidPipeline(_))
        ));
        assert!(Pipeline::<i64>::new("two words", vec![]).is_err());

        let anon = Pipeline::<i64>::anonymous(vec![add(1)]);
        assert!(anon.name().starts_with("pipeline_"));
        assert_eq!(anon.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_pipeline_resolves_input() {
        let pipeline = Pipeline::<String>::new("sample", vec![]).unwrap();
        assert_eq!(pipeline.invoke("foo".into()).await.unwrap(), "foo");
    }

    #[tokio::test]
    async fn test_steps_receive_previous_result() {
        let pipeline = Pipeline::new(
            "sample",
            vec![
                step(|s: String| async move { Ok(s + "bar") }),
                step(|s: String| async move { Ok(s + "!") }),
            ],
        )
        .unwrap();
        assert_eq!(pipeline.invoke("foo".into()).await.unwrap(), "foobar!");
    }

    #[tokio::test]
    async fn test_failure_short_circuits() {
        let reached = Arc::new(AtomicBool::new(false));
        let flag = reached.clone();
        let pipeline = Pipeline::new(
            "sample",
            vec![
                add(1),
                step(|_: i64| async move { Err(DispatchError::other("halt")) }),
                step(move |x: i64| {
                    flag.store(true, Ordering::SeqCst);
                    async move { Ok(x) }
                }),
            ],
        )
        .unwrap();

        let err = pipeline.invoke(1).await.unwrap_err();
        assert_eq!(err.to_string(), "halt");
        assert!(!reached.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_steps_never_overlap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let steps: Vec<BoxStep<i64>> = (0..4)
            .map(|_| {
                let in_flight = in_flight.clone();
                let max_seen = max_seen.clone();
                step(move |x: i64| {
                    let in_flight = in_flight.clone();
                    let max_seen = max_seen.clone();
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok(x + 1)
                    }
                })
            })
            .collect();

        let pipeline = Pipeline::new("slow", steps).unwrap();
        assert_eq!(pipeline.invoke(0).await.unwrap(), 4);
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrap_calls_handler_without_pipelines() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = called.clone();
        let wrapped = Pipeline::wrap(
            vec![],
            step(move |x: i64| {
                flag.store(true, Ordering::SeqCst);
                async move { Ok(x) }
            }),
        );
        assert_eq!(wrapped.call(5).await.unwrap(), 5);
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_wrap_runs_pipeline_before_handler() {
        let pipeline = Arc::new(Pipeline::new("sample", vec![add(2), mul(3)]).unwrap());
        let wrapped = Pipeline::wrap(
            vec![pipeline],
            step(|x: i64| async move {
                assert_eq!(x, 9);
                Ok(x)
            }),
        );
        assert_eq!(wrapped.call(1).await.unwrap(), 9);
    }

    #[tokio::test]
    async fn test_wrap_keeps_array_order() {
        let first = Arc::new(Pipeline::new("first", vec![add(2)]).unwrap());
        let second = Arc::new(Pipeline::new("second", vec![mul(3)]).unwrap());

        let identity = || step(|x: i64| async move { Ok(x) });
        let wrapped = Pipeline::wrap(vec![first.clone(), second.clone()], identity());
        assert_eq!(wrapped.call(1).await.unwrap(), 9);

        let reversed = Pipeline::wrap(vec![second, first], identity());
        assert_eq!(reversed.call(1).await.unwrap(), 5);
    }
}
