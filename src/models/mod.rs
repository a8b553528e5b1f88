pub mod alert;
pub mod enums;
pub mod settings;
pub mod task;
pub mod user;

pub use alert::SosAlert;
pub use enums::{AlarmSound, Role, Theme};
pub use settings::Settings;
pub use task::Task;
pub use user::UserProfile;
