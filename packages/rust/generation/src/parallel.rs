use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use coursebuilder_shared::{CourseBuilderError, Result};

use crate::{Completion, GenerateRequest, Generator};

/// Run `requests` concurrently with at most `limit` in flight.
///
/// Completions come back in request order regardless of finish order. The
/// first failure (in request order) fails the whole batch and aborts the
/// tasks that are still pending.
#[instrument(skip_all, fields(requests = requests.len(), limit = limit))]
pub async fn generate_parallel(
    generator: Arc<dyn Generator>,
    requests: Vec<GenerateRequest>,
    limit: usize,
) -> Result<Vec<Completion>> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut handles: Vec<JoinHandle<Result<Completion>>> = Vec::with_capacity(requests.len());

    for request in requests {
        let generator = generator.clone();
        let sem = semaphore.clone();

        handles.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await.map_err(|e| {
                CourseBuilderError::Generation(format!("concurrency limiter closed: {e}"))
            })?;
            generator.generate(request).await
        }));
    }

    let mut completions = Vec::with_capacity(handles.len());
    let mut pending = handles.into_iter().enumerate();

    while let Some((index, handle)) = pending.next() {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(e) => Err(CourseBuilderError::Generation(format!(
                "generation task {index} panicked or was cancelled: {e}"
            ))),
        };

        match outcome {
            Ok(completion) => completions.push(completion),
            Err(e) => {
                for (_, rest) in pending.by_ref() {
                    rest.abort();
                }
                debug!(index, error = %e, "parallel batch failed");
                return Err(e);
            }
        }
    }

    Ok(completions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Echoes the prompt back after a delay taken from the prompt's numeric
    /// suffix, tracking the peak number of concurrent calls.
    #[derive(Default)]
    struct Echo {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Generator for Echo {
        async fn generate(&self, request: GenerateRequest) -> Result<Completion> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let delay: u64 = request
                .prompt
                .rsplit('-')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if request.prompt.starts_with("fail") {
                return Err(CourseBuilderError::Generation("boom".into()));
            }
            Ok(Completion::text(format!("echo {}", request.prompt)))
        }
    }

    fn requests(prompts: &[&str]) -> Vec<GenerateRequest> {
        prompts.iter().map(|p| GenerateRequest::new(*p)).collect()
    }

    #[tokio::test]
    async fn preserves_request_order() {
        let generator = Arc::new(Echo::default());
        let out = generate_parallel(
            generator,
            requests(&["a-60", "b-5", "c-30", "d-0"]),
            4,
        )
        .await
        .unwrap();

        let texts: Vec<&str> = out.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["echo a-60", "echo b-5", "echo c-30", "echo d-0"]);
    }

    #[tokio::test]
    async fn empty_batch_returns_empty() {
        let generator = Arc::new(Echo::default());
        let out = generate_parallel(generator, Vec::new(), 4).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn one_failure_fails_batch() {
        let generator = Arc::new(Echo::default());
        let err = generate_parallel(generator, requests(&["a-5", "fail-1", "c-5"]), 3)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn respects_concurrency_limit() {
        let generator = Arc::new(Echo::default());
        let prompts: Vec<String> = (0..10).map(|i| format!("p{i}-20")).collect();
        let reqs = prompts.iter().map(GenerateRequest::new).collect();

        let out = generate_parallel(generator.clone(), reqs, 3).await.unwrap();

        assert_eq!(out.len(), 10);
        let peak = generator.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight was {peak}");
        assert!(peak >= 2, "expected some overlap, peak was {peak}");
    }

    #[tokio::test]
    async fn zero_limit_still_makes_progress() {
        let generator = Arc::new(Echo::default());
        let out = generate_parallel(generator, requests(&["a-0", "b-0"]), 0)
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
    }
}
