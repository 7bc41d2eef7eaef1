//! Partition samples into metric families by name prefix.
//!
//! Four families are recognized: process, runtime, http and the application's
//! own metrics. A sample lands in the first family whose prefix its name
//! starts with, checked in that order. Samples matching no prefix are left out
//! of every family and so are invisible to the reducers.

use serde::{Deserialize, Serialize};

use crate::parser::MetricSample;

fn default_process() -> String {
    "process_".to_string()
}

fn default_runtime() -> String {
    "nodejs_".to_string()
}

fn default_http() -> String {
    "http_".to_string()
}

fn default_application() -> String {
    "mw_".to_string()
}

/// Name prefixes of the four families
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Prefixes {
    /// Prefix of process metrics
    #[serde(default = "default_process")]
    pub process: String,
    /// Prefix of language runtime metrics
    #[serde(default = "default_runtime")]
    pub runtime: String,
    /// Prefix of HTTP server metrics
    #[serde(default = "default_http")]
    pub http: String,
    /// Prefix of the application's own metrics
    #[serde(default = "default_application")]
    pub application: String,
}

impl Default for Prefixes {
    fn default() -> Self {
        Self {
            process: default_process(),
            runtime: default_runtime(),
            http: default_http(),
            application: default_application(),
        }
    }
}

/// Samples partitioned by family, each family in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Classified {
    /// Samples whose name starts with the process prefix
    pub process: Vec<MetricSample>,
    /// Samples whose name starts with the runtime prefix
    pub runtime: Vec<MetricSample>,
    /// Samples whose name starts with the http prefix
    pub http: Vec<MetricSample>,
    /// Samples whose name starts with the application prefix
    pub application: Vec<MetricSample>,
    #[serde(skip)]
    prefixes: Prefixes,
}

/// Partition `samples` by name prefix.
///
/// The input is left untouched; matching samples are cloned into their family.
#[must_use]
pub fn classify(samples: &[MetricSample], prefixes: &Prefixes) -> Classified {
    let mut classified = Classified {
        prefixes: prefixes.clone(),
        ..Classified::default()
    };

    for sample in samples {
        let name = sample.name.as_str();
        let family = if name.starts_with(&prefixes.process) {
            &mut classified.process
        } else if name.starts_with(&prefixes.runtime) {
            &mut classified.runtime
        } else if name.starts_with(&prefixes.http) {
            &mut classified.http
        } else if name.starts_with(&prefixes.application) {
            &mut classified.application
        } else {
            continue;
        };
        family.push(sample.clone());
    }

    classified
}

fn member<'a>(
    family: &'a [MetricSample],
    prefix: &'a str,
    name: &'a str,
) -> impl Iterator<Item = &'a MetricSample> + 'a {
    family.iter().filter(move |sample| {
        sample
            .name
            .strip_prefix(prefix)
            .is_some_and(|rest| rest == name)
    })
}

impl Classified {
    /// The prefixes this partition was made with.
    #[must_use]
    pub fn prefixes(&self) -> &Prefixes {
        &self.prefixes
    }

    /// Application samples named `<application prefix><name>`, in order.
    pub fn application<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricSample> + 'a {
        member(&self.application, &self.prefixes.application, name)
    }

    /// HTTP samples named `<http prefix><name>`, in order.
    pub fn http<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricSample> + 'a {
        member(&self.http, &self.prefixes.http, name)
    }

    /// Runtime samples named `<runtime prefix><name>`, in order.
    pub fn runtime<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricSample> + 'a {
        member(&self.runtime, &self.prefixes.runtime, name)
    }

    /// Process samples named `<process prefix><name>`, in order.
    pub fn process<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetricSample> + 'a {
        member(&self.process, &self.prefixes.process, name)
    }

    /// Total number of classified samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.process.len() + self.runtime.len() + self.http.len() + self.application.len()
    }

    /// True when no sample matched any family.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{MetricKind, parse};
    use proptest::prelude::*;

    const PAYLOAD: &str = r#"
process_cpu_seconds_total 12.5
nodejs_eventloop_lag_seconds 0.0042
http_request_duration_seconds_count{method="GET",route="/x"} 3
mw_user_count 17
go_goroutines 8
mw_provider_status_count{provider_id="alpha",status="success"} 80
"#;

    #[test]
    fn partitions_by_prefix() {
        let samples = parse(PAYLOAD).expect("not empty");
        let classified = classify(&samples, &Prefixes::default());

        assert_eq!(classified.process.len(), 1);
        assert_eq!(classified.runtime.len(), 1);
        assert_eq!(classified.http.len(), 1);
        assert_eq!(classified.application.len(), 2);
        assert_eq!(classified.len(), 5);
        // go_goroutines matches nothing and is dropped, but still parsed.
        assert_eq!(samples.len(), 6);
    }

    #[test]
    fn preserves_relative_order() {
        let samples = parse(PAYLOAD).expect("not empty");
        let classified = classify(&samples, &Prefixes::default());
        let names: Vec<&str> = classified
            .application
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["mw_user_count", "mw_provider_status_count"]);
    }

    #[test]
    fn first_match_wins_for_overlapping_prefixes() {
        let samples = parse("app_http_hits 1\n").expect("not empty");
        let prefixes = Prefixes {
            process: "app_".to_string(),
            runtime: "app_http_".to_string(),
            http: "app_http_".to_string(),
            application: "app_".to_string(),
        };
        let classified = classify(&samples, &prefixes);
        assert_eq!(classified.process.len(), 1);
        assert_eq!(classified.len(), 1);
    }

    #[test]
    fn member_lookup_uses_configured_prefix() {
        let samples = parse("acme_user_count 4\nmw_user_count 9\n").expect("not empty");
        let prefixes = Prefixes {
            application: "acme_".to_string(),
            ..Prefixes::default()
        };
        let classified = classify(&samples, &prefixes);
        let found: Vec<f64> = classified.application("user_count").map(|s| s.value).collect();
        assert_eq!(found, vec![4.0]);
        assert_eq!(classified.application("user").count(), 0);
    }

    #[test]
    fn empty_partition() {
        let classified = classify(&[], &Prefixes::default());
        assert!(classified.is_empty());
    }

    fn sample_strategy() -> impl Strategy<Value = MetricSample> {
        (
            prop_oneof![
                Just("process_"),
                Just("nodejs_"),
                Just("http_"),
                Just("mw_"),
                Just("other_"),
                Just(""),
            ],
            "[a-z]{1,6}",
            0.0..1e6_f64,
        )
            .prop_map(|(prefix, rest, value)| MetricSample {
                name: format!("{prefix}{rest}"),
                kind: MetricKind::Untyped,
                description: String::new(),
                value,
                labels: None,
                timestamp: None,
            })
    }

    proptest! {
        #[test]
        fn prop_each_sample_in_at_most_one_family(
            samples in prop::collection::vec(sample_strategy(), 0..40)
        ) {
            let prefixes = Prefixes::default();
            let classified = classify(&samples, &prefixes);

            let expected = samples
                .iter()
                .filter(|s| {
                    ["process_", "nodejs_", "http_", "mw_"]
                        .iter()
                        .any(|p| s.name.starts_with(p))
                })
                .count();
            prop_assert_eq!(classified.len(), expected);

            for sample in &classified.process {
                prop_assert!(sample.name.starts_with(&prefixes.process));
            }
            for sample in &classified.runtime {
                prop_assert!(sample.name.starts_with(&prefixes.runtime));
            }
            for sample in &classified.http {
                prop_assert!(sample.name.starts_with(&prefixes.http));
            }
            for sample in &classified.application {
                prop_assert!(sample.name.starts_with(&prefixes.application));
            }
        }

        #[test]
        fn prop_classify_is_deterministic(
            samples in prop::collection::vec(sample_strategy(), 0..40)
        ) {
            let prefixes = Prefixes::default();
            prop_assert_eq!(classify(&samples, &prefixes), classify(&samples, &prefixes));
        }
    }
}
