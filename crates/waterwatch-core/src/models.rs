pub mod classification;
pub mod coordinate;
pub mod imagery;
pub mod taxonomy;
pub mod verdict;

pub use classification::ClassificationResult;
pub use coordinate::{
    parse_date, BoundingBox, Coordinate, CoordinateKey, ImageDimensions, ImageRequest,
    DEFAULT_COORDINATE_PRECISION,
};
pub use imagery::{
    Acquisition, AttemptOutcome, CacheKey, CachedImage, ImageFormat, ProviderAttempt, ProviderId,
    ProviderImage, ProviderStatus,
};
pub use taxonomy::{SimilarityGroup, Taxonomy, TaxonomyEntry, TAXONOMY_VERSION};
pub use verdict::{
    PollutionReport, RecordId, VerificationRecord, VerificationStats, VerificationVerdict,
};
