//! Bounded backward search for time-stamped resources.
//!
//! Forecast bundles are published near the end of the month, after a delay
//! nobody controls. Starting at a given month, the retriever walks back one
//! month at a time and returns the first bundle that downloads and decodes.

use crate::config::render;
use crate::error::ConaguaError;
use crate::transport::Transport;
use crate::types::months::{month_name, season_code};
use crate::types::period::Period;
use log::{info, warn};

/// One location tried by a [`FallbackRetriever`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalAttempt {
    pub period: Period,
    pub location: String,
}

/// A decoded resource together with where and when it was found.
#[derive(Debug, Clone)]
pub struct Retrieved<D> {
    pub period: Period,
    pub location: String,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    pub value: D,
}

pub struct FallbackRetriever<'a, T> {
    transport: &'a T,
    template: String,
    kind: String,
    window: u32,
}

impl<'a, T: Transport> FallbackRetriever<'a, T> {
    /// # Arguments
    ///
    /// * `template` - Location template, see [`FallbackRetriever::location`].
    /// * `kind` - Data sub-type substituted for `{kind}` (e.g. `"Lluvia"`).
    /// * `window` - Maximum number of months tried.
    pub fn new(
        transport: &'a T,
        template: impl Into<String>,
        kind: impl Into<String>,
        window: u32,
    ) -> Self {
        Self {
            transport,
            template: template.into(),
            kind: kind.into(),
            window,
        }
    }

    /// Renders the location of `period`.
    ///
    /// Placeholders: `{year}`, `{month}` (two digits), `{month_name}`
    /// (`Marzo`), `{season}` (`03-MAM`) and `{kind}`.
    pub fn location(&self, period: Period) -> String {
        let year = period.year().to_string();
        let month = format!("{:02}", period.month());
        render(
            &self.template,
            &[
                ("year", year.as_str()),
                ("month_name", month_name(period.month()).unwrap_or_default()),
                ("month", month.as_str()),
                ("season", season_code(period.month()).unwrap_or_default()),
                ("kind", self.kind.as_str()),
            ],
        )
    }

    /// The periods and locations tried from `start`, newest first.
    pub fn attempts(&self, start: Period) -> impl Iterator<Item = RetrievalAttempt> + '_ {
        std::iter::successors(Some(start), |period| Some(period.previous()))
            .take(self.window as usize)
            .map(|period| RetrievalAttempt {
                period,
                location: self.location(period),
            })
    }

    /// Fetches and decodes the newest available resource at or before `start`.
    ///
    /// Any failure of an attempt, whether in the transport or in `decode`,
    /// moves the search one month back.
    ///
    /// # Errors
    ///
    /// Returns [`ConaguaError::ResourceExhausted`] when every month of the
    /// window failed.
    pub async fn retrieve<D, F>(
        &self,
        start: Period,
        mut decode: F,
    ) -> Result<Retrieved<D>, ConaguaError>
    where
        F: FnMut(Vec<u8>) -> Result<D, ConaguaError>,
    {
        let mut attempts = 0;
        for attempt in self.attempts(start) {
            attempts += 1;
            info!("Trying {} for {}", attempt.location, attempt.period);
            let outcome = match self.transport.fetch(&attempt.location).await {
                Ok(bytes) => decode(bytes),
                Err(e) => Err(e.into()),
            };
            match outcome {
                Ok(value) => {
                    info!("Retrieved resource for {}", attempt.period);
                    return Ok(Retrieved {
                        period: attempt.period,
                        location: attempt.location,
                        attempts,
                        value,
                    });
                }
                Err(e) => warn!(
                    "Resource for {} not available ({}). Trying previous month.",
                    attempt.period, e
                ),
            }
        }

        Err(ConaguaError::ResourceExhausted {
            location: self.template.clone(),
            start,
            window: self.window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryTransport;

    const TEMPLATE: &str = "https://host/{season}-Pronostico-de-{month_name}-{year}-{kind}.zip";

    fn identity(bytes: Vec<u8>) -> Result<Vec<u8>, ConaguaError> {
        Ok(bytes)
    }

    #[test]
    fn test_location_rendering() {
        let transport = MemoryTransport::default();
        let retriever = FallbackRetriever::new(&transport, TEMPLATE, "Lluvia", 2);
        assert_eq!(
            retriever.location(Period::new(2025, 3)),
            "https://host/03-MAM-Pronostico-de-Marzo-2025-Lluvia.zip"
        );

        let numeric = FallbackRetriever::new(&transport, "https://host/{year}/{month}.zip", "x", 1);
        assert_eq!(numeric.location(Period::new(2024, 9)), "https://host/2024/09.zip");
    }

    #[test]
    fn test_attempts_walk_backwards_across_year() {
        let transport = MemoryTransport::default();
        let retriever = FallbackRetriever::new(&transport, "{year}-{month}", "Lluvia", 3);
        let locations: Vec<String> = retriever
            .attempts(Period::new(2025, 2))
            .map(|a| a.location)
            .collect();
        assert_eq!(locations, vec!["2025-02", "2025-01", "2024-12"]);
    }

    #[tokio::test]
    async fn test_falls_back_one_month() -> Result<(), ConaguaError> {
        let transport = MemoryTransport::default().with(
            "https://host/12-DEF-Pronostico-de-Diciembre-2024-Lluvia.zip",
            b"december".to_vec(),
        );
        let retriever = FallbackRetriever::new(&transport, TEMPLATE, "Lluvia", 2);

        let retrieved = retriever.retrieve(Period::new(2025, 1), identity).await?;

        assert_eq!(retrieved.period, Period::new(2024, 12));
        assert_eq!(retrieved.attempts, 2);
        assert_eq!(retrieved.value, b"december");
        assert_eq!(transport.requests().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_after_window() {
        let transport = MemoryTransport::default().with(
            "https://host/11-NDE-Pronostico-de-Noviembre-2024-Lluvia.zip",
            b"too old".to_vec(),
        );
        let retriever = FallbackRetriever::new(&transport, TEMPLATE, "Lluvia", 2);

        let result = retriever.retrieve(Period::new(2025, 1), identity).await;

        match result {
            Err(ConaguaError::ResourceExhausted { start, window, .. }) => {
                assert_eq!(start, Period::new(2025, 1));
                assert_eq!(window, 2);
            }
            other => panic!("expected ResourceExhausted, got {:?}", other.map(|r| r.period)),
        }
        assert_eq!(
            transport.requests(),
            vec![
                "https://host/01-EFM-Pronostico-de-Enero-2025-Lluvia.zip".to_string(),
                "https://host/12-DEF-Pronostico-de-Diciembre-2024-Lluvia.zip".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_failure_counts_as_missing() -> Result<(), ConaguaError> {
        let transport = MemoryTransport::default()
            .with("2025-06", b"corrupt".to_vec())
            .with("2025-05", b"good".to_vec());
        let retriever = FallbackRetriever::new(&transport, "{year}-{month}", "Lluvia", 2);

        let retrieved = retriever
            .retrieve(Period::new(2025, 6), |bytes| {
                if bytes == b"good" {
                    Ok(bytes.len())
                } else {
                    Err(ConaguaError::ForecastBundle("corrupt".to_string()))
                }
            })
            .await?;

        assert_eq!(retrieved.period, Period::new(2025, 5));
        assert_eq!(retrieved.value, 4);
        Ok(())
    }

    #[tokio::test]
    async fn test_first_attempt_success_does_not_look_back() -> Result<(), ConaguaError> {
        let transport = MemoryTransport::default()
            .with("2025-06", b"june".to_vec())
            .with("2025-05", b"may".to_vec());
        let retriever = FallbackRetriever::new(&transport, "{year}-{month}", "Lluvia", 2);

        let retrieved = retriever.retrieve(Period::new(2025, 6), identity).await?;

        assert_eq!(retrieved.attempts, 1);
        assert_eq!(transport.requests(), vec!["2025-06".to_string()]);
        Ok(())
    }
}
