//! Offer file discovery
//!
//! Offers are published as files named `{prefix}_{YYYYMMDD}.{ext}` under
//! `<pdf_base_dir>/offers/`. The date in the name is the last day the offer
//! is valid. Only file names are logged, never full paths.
use crate::models::OfferRecord;
use async_trait::async_trait;
use chrono::NaiveDate;
use regex::Regex;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

const OFFERS_SUBDIR: &str = "offers";

#[async_trait]
pub trait OfferSource: Send + Sync {
    /// The active offer with the nearest expiry on or after `today`
    async fn fetch_active_offer(&self, today: NaiveDate) -> Option<OfferRecord>;
}

/// Anchored, case-sensitive file name pattern capturing the 8-digit date
pub fn offer_file_pattern(prefix: &str, extension: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"^{}_(\d{{8}})\.{}$",
        regex::escape(prefix),
        regex::escape(extension)
    ))
}

fn parse_compact_date(digits: &str) -> Option<NaiveDate> {
    let year = digits.get(0..4)?.parse::<i32>().ok()?;
    let month = digits.get(4..6)?.parse::<u32>().ok()?;
    let day = digits.get(6..8)?.parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Pick the active offer among candidate file names.
///
/// Expired offers and names that do not match are ignored; invalid calendar
/// dates are skipped with a warning.
pub fn select_active_offer<I>(pattern: &Regex, file_names: I, today: NaiveDate) -> Option<OfferRecord>
where
    I: IntoIterator<Item = String>,
{
    let mut best: Option<OfferRecord> = None;

    for file_name in file_names {
        let Some(captures) = pattern.captures(&file_name) else {
            debug!(file_name = %file_name, "Ignoring file that is not an offer");
            continue;
        };

        let Some(expiry) = parse_compact_date(&captures[1]) else {
            warn!(file_name = %file_name, "Offer file has an invalid date, skipping");
            continue;
        };

        if expiry < today {
            continue;
        }

        let nearer = best.as_ref().map_or(true, |current| expiry < current.expiry);
        if nearer {
            best = Some(OfferRecord { expiry, file_name });
        }
    }

    best
}

/// Offer source reading the offers directory on local disk
#[derive(Debug, Clone)]
pub struct FsOfferStore {
    offers_dir: PathBuf,
    pattern: Regex,
}

impl FsOfferStore {
    pub fn new(
        pdf_base_dir: impl Into<PathBuf>,
        prefix: &str,
        extension: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            offers_dir: pdf_base_dir.into().join(OFFERS_SUBDIR),
            pattern: offer_file_pattern(prefix, extension)?,
        })
    }

    /// Names of regular files directly inside the offers directory
    async fn list_file_names(&self) -> std::io::Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.offers_dir).await?;
        let mut names = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let is_file = match entry.file_type().await {
                Ok(file_type) => file_type.is_file(),
                Err(_) => false,
            };
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        Ok(names)
    }
}

#[async_trait]
impl OfferSource for FsOfferStore {
    async fn fetch_active_offer(&self, today: NaiveDate) -> Option<OfferRecord> {
        let names = match self.list_file_names().await {
            Ok(names) => names,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Offers directory does not exist");
                return None;
            }
            Err(e) => {
                warn!(error_kind = ?e.kind(), "Failed to read offers directory");
                return None;
            }
        };

        let offer = select_active_offer(&self.pattern, names, today);
        match &offer {
            Some(record) => debug!(
                file_name = %record.file_name,
                expiry = %record.expiry,
                "Active offer found"
            ),
            None => debug!(%today, "No active offer"),
        }
        offer
    }
}
