//! Storage keys for structured page fields and per-entity metadata.
//!
//! Every key the pipeline reads or writes is listed here once. The field
//! keys keep the identifiers the course page field group was registered
//! with, so existing pages stay readable.

/// Structured fields stored on a course page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageField {
    CustomTitle,
    BackgroundImage,
    Content,
    Price,
    Instructor,
    Categories,
    Students,
    Views,
    InstructorPosition,
    InstructorBio,
    VideoTrailer,
    CourseProductLink,
    WebinarProductLink,
}

impl PageField {
    pub const fn key(self) -> &'static str {
        match self {
            PageField::CustomTitle => "field_681ccc5ab1238",
            PageField::BackgroundImage => "field_682187522193c",
            PageField::Content => "field_681ccc66b1239",
            PageField::Price => "field_681ccc6eb123a",
            PageField::Instructor => "field_681ccc7eb123b",
            PageField::Categories => "field_681ccc91b123d",
            PageField::Students => "field_681ccc96b123e",
            PageField::Views => "field_681ccc9db123f",
            PageField::InstructorPosition => "field_682187682193d",
            PageField::InstructorBio => "field_6821877b2193e",
            PageField::VideoTrailer => "field_682187802193f",
            PageField::CourseProductLink => "field_6821879221940",
            PageField::WebinarProductLink => "field_6821879e21941",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PageField::CustomTitle => "course_custom_title",
            PageField::BackgroundImage => "course_background_image",
            PageField::Content => "course_content",
            PageField::Price => "course_price",
            PageField::Instructor => "course_instructor",
            PageField::Categories => "course_categories",
            PageField::Students => "course_students",
            PageField::Views => "course_views",
            PageField::InstructorPosition => "instructor_position",
            PageField::InstructorBio => "instructor_bio",
            PageField::VideoTrailer => "video_trailer",
            PageField::CourseProductLink => "course_product_link",
            PageField::WebinarProductLink => "webinar_product_link",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.key() == key)
    }

    pub const ALL: [PageField; 13] = [
        PageField::CustomTitle,
        PageField::BackgroundImage,
        PageField::Content,
        PageField::Price,
        PageField::Instructor,
        PageField::Categories,
        PageField::Students,
        PageField::Views,
        PageField::InstructorPosition,
        PageField::InstructorBio,
        PageField::VideoTrailer,
        PageField::CourseProductLink,
        PageField::WebinarProductLink,
    ];
}

/// Scalar metadata keys. Which entity scope a key lives under is noted on
/// each variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetaKey {
    /// Source course -> course page id.
    RelatedPageId,
    /// Course page or product -> source course id.
    RelatedSourceCourseId,
    /// Source course -> standard product id.
    StandardProductId,
    /// Source course -> live (webinar) product id.
    LiveProductId,
    /// Course page: raw background image URL.
    BackgroundImageUrl,
    /// Source course: `update` requests a resync on the next save.
    UpdateCoursePage,
    /// Site: category normalization finished.
    CategoriesUpdated,
    /// Site: category normalization offset.
    CategoriesUpdateOffset,
}

impl MetaKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            MetaKey::RelatedPageId => "related_course_id",
            MetaKey::RelatedSourceCourseId => "related_stm_course_id",
            MetaKey::StandardProductId => "related_course_product_id",
            MetaKey::LiveProductId => "related_webinar_product_id",
            MetaKey::BackgroundImageUrl => "course_background_image",
            MetaKey::UpdateCoursePage => "update_course_page",
            MetaKey::CategoriesUpdated => "course_mgmt_categories_updated",
            MetaKey::CategoriesUpdateOffset => "course_mgmt_categories_update_offset",
        }
    }
}
