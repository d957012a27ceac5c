pub mod error;
pub mod file;
pub mod memory;
pub mod progress;
pub mod traits;

pub use error::{SourceError, SourceErrorKind};
pub use file::{FileLibrary, FileRemote};
pub use memory::{InMemoryLibrary, InMemoryRemote, LibraryStore, LocalWrite, RemoteStore};
pub use progress::{ProgressCallback, ProgressTracker, ProgressUpdate};
pub use traits::{LocalLibrary, RemoteService};
