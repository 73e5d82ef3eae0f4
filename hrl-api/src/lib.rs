// builders, persistence and the pieces the programs are assembled from
pub mod artifact;
pub mod builders;
pub mod device;
pub mod model;
pub mod scenario;

pub use artifact::{ArtifactError, AlgorithmKind};
pub use device::DevicePreference;
pub use model::Model;
pub use scenario::Scenario;
