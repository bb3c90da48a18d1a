//! Page Components

mod course;
mod payment;

pub use course::CoursePage;
pub use payment::PaymentResultPage;
