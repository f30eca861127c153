pub mod model;
pub mod store;
pub mod view;

pub use model::{Note, NoteColor, NoteId, NotePatch};
pub use store::NoteStore;
pub use view::{Draft, EditValidation, ModalState, NotesPolicy, NotesView};
