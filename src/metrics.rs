//! Prometheus metrics fed from the lifecycle bus.

use prometheus::{histogram_opts, Encoder, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use soulbrowser_event_bus::ExecutionEvent;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{error, warn};

pub struct ReplayMetrics {
    registry: Registry,
    steps: IntCounterVec,
    fallbacks: IntCounterVec,
    executions: IntCounterVec,
    step_duration: HistogramVec,
}

impl Default for ReplayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplayMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let steps = IntCounterVec::new(
            Opts::new("soul_replay_steps_total", "Replayed steps by final path and result"),
            &["path", "result"],
        )
        .expect("create step counter");
        let fallbacks = IntCounterVec::new(
            Opts::new("soul_replay_fallbacks_total", "Fallback attempts by source and target path"),
            &["from", "to"],
        )
        .expect("create fallback counter");
        let executions = IntCounterVec::new(
            Opts::new("soul_replay_executions_total", "Completed replay runs by result"),
            &["result"],
        )
        .expect("create execution counter");
        let step_duration = HistogramVec::new(
            histogram_opts!(
                "soul_replay_step_duration_ms",
                "Wall time per replayed step (milliseconds)",
                vec![10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 15000.0, 60000.0]
            ),
            &["path"],
        )
        .expect("create step duration histogram");

        for collector in [
            Box::new(steps.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(fallbacks.clone()),
            Box::new(executions.clone()),
            Box::new(step_duration.clone()),
        ] {
            if let Err(err) = registry.register(collector) {
                error!(?err, "failed to register replay metric");
            }
        }

        Self {
            registry,
            steps,
            fallbacks,
            executions,
            step_duration,
        }
    }

    pub fn observe(&self, event: &ExecutionEvent) {
        match event {
            ExecutionEvent::StepCompleted {
                path_used,
                success,
                duration_ms,
                ..
            } => {
                self.steps
                    .with_label_values(&[path_used.as_str(), result_label(*success)])
                    .inc();
                self.step_duration
                    .with_label_values(&[path_used.as_str()])
                    .observe(*duration_ms as f64);
            }
            ExecutionEvent::FallbackStarted { from, to, .. } => {
                self.fallbacks.with_label_values(&[from.as_str(), to.as_str()]).inc();
            }
            ExecutionEvent::ExecutionCompleted { overall_success, .. } => {
                self.executions
                    .with_label_values(&[result_label(*overall_success)])
                    .inc();
            }
            _ => {}
        }
    }

    pub fn steps_total(&self, path: &str, result: &str) -> u64 {
        self.steps.with_label_values(&[path, result]).get()
    }

    pub fn fallbacks_total(&self, from: &str, to: &str) -> u64 {
        self.fallbacks.with_label_values(&[from, to]).get()
    }

    pub fn executions_total(&self, result: &str) -> u64 {
        self.executions.with_label_values(&[result]).get()
    }

    /// Text exposition format.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(err) = encoder.encode(&self.registry.gather(), &mut buffer) {
            warn!(?err, "failed to encode replay metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn result_label(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Bus subscription folding lifecycle events into [`ReplayMetrics`].
pub struct MetricsListener {
    receiver: broadcast::Receiver<ExecutionEvent>,
    metrics: ReplayMetrics,
}

impl MetricsListener {
    pub fn new(receiver: broadcast::Receiver<ExecutionEvent>) -> Self {
        Self {
            receiver,
            metrics: ReplayMetrics::new(),
        }
    }

    /// Fold every event published so far. Returns how many were seen.
    pub fn drain(&mut self) -> usize {
        let mut seen = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    self.metrics.observe(&event);
                    seen += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "metrics listener lagged; some events were not counted");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        seen
    }

    pub fn metrics(&self) -> &ReplayMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soulbrowser_core_types::{ExecutionId, ExecutionPath};
    use soulbrowser_event_bus::{EventBus, InMemoryBus};

    fn step_completed(path: ExecutionPath, success: bool) -> ExecutionEvent {
        ExecutionEvent::StepCompleted {
            execution_id: ExecutionId("e".into()),
            index: 0,
            name: "s".into(),
            path_used: path,
            success,
            fallback_occurred: false,
            duration_ms: 42,
        }
    }

    #[test]
    fn counts_steps_fallbacks_and_runs() {
        let metrics = ReplayMetrics::new();
        metrics.observe(&step_completed(ExecutionPath::Snippet, true));
        metrics.observe(&step_completed(ExecutionPath::Reasoning, false));
        metrics.observe(&ExecutionEvent::FallbackStarted {
            execution_id: ExecutionId("e".into()),
            index: 1,
            name: "s".into(),
            from: ExecutionPath::Snippet,
            to: ExecutionPath::Reasoning,
            reason: "boom".into(),
        });
        metrics.observe(&ExecutionEvent::ExecutionCompleted {
            execution_id: ExecutionId("e".into()),
            overall_success: false,
            total_duration_ms: 50,
        });

        assert_eq!(metrics.steps_total("snippet", "success"), 1);
        assert_eq!(metrics.steps_total("reasoning", "failure"), 1);
        assert_eq!(metrics.fallbacks_total("snippet", "reasoning"), 1);
        assert_eq!(metrics.executions_total("failure"), 1);

        let text = metrics.render();
        assert!(text.contains("soul_replay_steps_total{path=\"snippet\",result=\"success\"} 1"));
        assert!(text.contains("soul_replay_step_duration_ms_count{path=\"reasoning\"} 1"));
    }

    #[tokio::test]
    async fn listener_drains_published_events() {
        let bus = InMemoryBus::<ExecutionEvent>::new(8);
        let mut listener = MetricsListener::new(bus.subscribe());
        bus.publish(step_completed(ExecutionPath::Snippet, true)).await.unwrap();
        bus.publish(step_completed(ExecutionPath::Snippet, true)).await.unwrap();
        assert_eq!(listener.drain(), 2);
        assert_eq!(listener.drain(), 0);
        assert_eq!(listener.metrics().steps_total("snippet", "success"), 2);
    }
}
