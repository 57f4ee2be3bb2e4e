mod card;
mod record;
mod session;

pub use card::{extract_post_id, handle_from_permalink, parse_timestamp, permalink_from_hrefs, Permalink};
pub use record::PostRecord;
pub use session::{CollectLimits, ExtractionSession, SessionState, StopReason};
