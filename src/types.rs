pub mod mayday;
pub mod push;
