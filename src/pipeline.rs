//! One `/next` request: select, extract, transform, respond.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{Instrument, debug, field, info, info_span};

use crate::catalog::{self, MediaKind};
use crate::config::Configuration;
use crate::error::{RequestError, Stage};
use crate::metadata::geocode::ReverseGeocoder;
use crate::metadata::{CaptureMetadata, MetadataExtractor};
use crate::publish::AssetPublisher;
use crate::scheduler::{RefillSource, RotationScheduler};

/// Body of a successful `/next` response.
#[derive(Debug, Clone, Serialize)]
pub struct NextResponse {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub meta: CaptureMetadata,
}

pub struct FramePipeline {
    scheduler: Arc<RotationScheduler>,
    extractor: MetadataExtractor,
    publisher: AssetPublisher,
}

impl FramePipeline {
    pub fn new(
        scheduler: RotationScheduler,
        extractor: MetadataExtractor,
        publisher: AssetPublisher,
    ) -> Self {
        Self {
            scheduler: Arc::new(scheduler),
            extractor,
            publisher,
        }
    }

    /// Scan the media directory and wire up every stage from `cfg`.
    ///
    /// # Errors
    /// Fails if the media directory is unusable or holds no eligible files,
    /// or if the geocoding client cannot be built.
    pub fn from_config(cfg: &Configuration) -> Result<Self> {
        let options = cfg.scan_options();
        let catalog = catalog::scan(&cfg.media_dir, &options)
            .with_context(|| format!("scanning media in {}", cfg.media_dir.display()))?;
        info!(count = catalog.len(), "cataloged media");

        let source = if cfg.rescan_on_exhaustion {
            RefillSource::Rescan {
                root: cfg.media_dir.clone(),
                options,
            }
        } else {
            RefillSource::Fixed
        };
        let scheduler = RotationScheduler::new(catalog, source, cfg.rotation_seed);

        let geocoder = if cfg.geocode.enabled {
            Some(ReverseGeocoder::new(&cfg.geocode).context("building geocode client")?)
        } else {
            info!("reverse geocoding disabled");
            None
        };

        Ok(Self::new(
            scheduler,
            MetadataExtractor::new(geocoder),
            AssetPublisher::new(&cfg.html_dir, cfg.jpeg_quality),
        ))
    }

    pub fn scheduler(&self) -> &RotationScheduler {
        &self.scheduler
    }

    /// Run one request through every stage.
    ///
    /// # Errors
    /// Returns the stage that failed; metadata problems never fail a request.
    pub async fn next(&self) -> Result<NextResponse, RequestError> {
        let span = info_span!("next", path = field::Empty, kind = field::Empty);
        async {
            let scheduler = Arc::clone(&self.scheduler);
            let entry = tokio::task::spawn_blocking(move || scheduler.take_next())
                .await
                .map_err(|e| RequestError::new(Stage::Selecting, e))?;
            let span = tracing::Span::current();
            span.record("path", field::display(entry.path.display()));
            span.record("kind", field::display(entry.kind()));

            debug!(stage = %Stage::Extracting);
            let meta = self
                .extractor
                .extract(&entry)
                .await
                .map_err(|e| RequestError::new(Stage::Extracting, e))?;

            debug!(stage = %Stage::Transforming, orientation = ?meta.orientation);
            let published = self
                .publisher
                .publish(&entry, &meta)
                .await
                .map_err(|e| RequestError::new(Stage::Transforming, e))?;

            debug!(stage = %Stage::Responding, published);
            info!(time = %meta.time, city = %meta.location.city, "serving next");
            Ok::<_, RequestError>(NextResponse {
                path: published.to_string(),
                kind: entry.kind(),
                meta,
            })
        }
        .instrument(span)
        .await
    }
}
