pub mod payment;
pub mod task;
pub mod user;

pub use payment::{Amount, NewPayment, Payment, PaymentInput};
pub use task::{Category, NewTask, Task, TaskInput, TaskPage, TaskPriority, TaskStatus};
pub use user::{NewUser, User, UserSummary};
