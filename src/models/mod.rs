pub mod task;
pub mod user;

pub use task::{SortDirection, SortField, Task, TaskFilter, TaskInput, TaskQuery, TaskSort, TaskUpdate};
pub use user::{LoginRequest, User, UserInput, UserUpdate};
