//! # pubdate_harvest
//!
//! Concurrent publication-date harvesting for lists of article URLs.
//!
//! Each URL is fetched with bounded concurrency and retries, then run
//! through an extraction cascade (meta tags, JSON-LD, visible text, inline
//! scripts) whose candidates are normalized to `YYYY-MM-DD`. Every URL
//! yields exactly one [`ResultRecord`](models::ResultRecord), whatever
//! happened to it.
//!
//! ```no_run
//! use pubdate_harvest::config::HarvestConfig;
//! use pubdate_harvest::coordinator::Coordinator;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = Coordinator::from_config(&HarvestConfig::default())?;
//! let records = coordinator
//!     .run(vec!["https://example.com/article".to_string()])
//!     .await;
//! for record in records {
//!     println!("{} {:?} {}", record.url, record.date, record.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod gate;
pub mod inputs;
pub mod models;
pub mod normalize;
pub mod outputs;
pub mod utils;
