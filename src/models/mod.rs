pub mod course;
pub mod order;
pub mod page;
pub mod product;
pub mod strapi;

pub use course::{CourseRecord, SourceCourse, UNKNOWN_INSTRUCTOR};
pub use order::{Enrollment, Order, OrderItem};
pub use page::{CoursePage, CoursePageView};
pub use product::{Product, ProductKind};
pub use strapi::{StrapiCourse, StrapiCourseInput};

pub const STATUS_PUBLISH: &str = "publish";
pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_TRASH: &str = "trash";
