//! Hourly price data: wire types, range building, fetching and projection
//!
//! Data flows fetcher -> range builder -> clock resolver, then raw points are
//! mapped to display records by the projector.

pub mod fetcher;
pub mod projector;
pub mod range;
pub mod types;

pub use fetcher::{
    CancelToken, HttpTransport, PriceFetcher, PriceQuery, PriceTransport, TransportResponse,
    build_request_url, iso_utc, parse_points,
};
pub use projector::UiProjector;
pub use range::RangeBuilder;
pub use types::{DisplayPoint, FetchRange, RawPricePoint, Resolution};
