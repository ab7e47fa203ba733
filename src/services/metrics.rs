use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

pub struct MetricsService {
    registry: Registry,
    submissions: IntCounterVec,
    auth_actions: IntCounterVec,
    http_errors: IntCounterVec,
    request_duration: HistogramVec,
}

impl MetricsService {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new("quote_submissions_total", "Quote submission attempts by outcome"),
            &["outcome"],
        )?;
        let auth_actions = IntCounterVec::new(
            Opts::new("auth_actions_total", "Account actions by result"),
            &["action", "result"],
        )?;
        let http_errors = IntCounterVec::new(
            Opts::new("http_errors_total", "HTTP error responses by class"),
            &["class"],
        )?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "HTTP request duration"),
            &["endpoint"],
        )?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(auth_actions.clone()))?;
        registry.register(Box::new(http_errors.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;

        Ok(Self {
            registry,
            submissions,
            auth_actions,
            http_errors,
            request_duration,
        })
    }

    pub fn record_submission(&self, outcome: &str) {
        self.submissions.with_label_values(&[outcome]).inc();
    }

    pub fn record_auth_action(&self, action: &str, succeeded: bool) {
        let result = if succeeded { "success" } else { "failure" };
        self.auth_actions.with_label_values(&[action, result]).inc();
    }

    pub fn record_error(&self, class: &str) {
        self.http_errors.with_label_values(&[class]).inc();
    }

    pub fn record_request_duration(&self, duration: std::time::Duration, endpoint: &str) {
        self.request_duration
            .with_label_values(&[endpoint])
            .observe(duration.as_secs_f64());
    }

    pub fn submission_count(&self, outcome: &str) -> u64 {
        self.submissions.with_label_values(&[outcome]).get()
    }

    /// Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub struct RequestTimer<'a> {
    metrics: &'a MetricsService,
    start: Instant,
    endpoint: String,
}

impl<'a> RequestTimer<'a> {
    pub fn new(metrics: &'a MetricsService, endpoint: String) -> Self {
        Self {
            metrics,
            start: Instant::now(),
            endpoint,
        }
    }
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        self.metrics
            .record_request_duration(self.start.elapsed(), &self.endpoint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_rendered() {
        let metrics = MetricsService::new().unwrap();
        metrics.record_submission("accepted");
        metrics.record_submission("accepted");
        metrics.record_auth_action("login", false);
        {
            let _timer = RequestTimer::new(&metrics, "GET /health".to_string());
        }

        assert_eq!(metrics.submission_count("accepted"), 2);
        let text = metrics.render().unwrap();
        assert!(text.contains("quote_submissions_total{outcome=\"accepted\"} 2"));
        assert!(text.contains("auth_actions_total{action=\"login\",result=\"failure\"} 1"));
        assert!(text.contains("request_duration_seconds_count{endpoint=\"GET /health\"} 1"));
    }
}
