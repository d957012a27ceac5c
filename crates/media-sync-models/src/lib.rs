pub mod activity;
pub mod artifact;
pub mod change;
pub mod domain;
pub mod item;
pub mod media;
pub mod media_ids;
pub mod state;

pub use activity::Activities;
pub use artifact::{Artifact, ArtifactAction, ArtifactBatch};
pub use change::{ChangeAction, ChangeRecord, FieldChange, FieldValue, Properties};
pub use domain::Domain;
pub use item::{Account, ItemKey, LibraryItem, RemoteItem};
pub use media::MediaType;
pub use media_ids::MediaIds;
pub use state::{Collection, DomainState, ListMembership, Lists, Playback, Presence, Rating, Watched};
