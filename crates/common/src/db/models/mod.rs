//! SeaORM entity models
//!
//! Database entities for Agora

mod category;
mod comment;
mod feedback;
mod notification;
mod paper;
mod paper_author;
mod paper_like;
mod profile;
mod review;
mod review_assignment;
mod shared_link;

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use paper_author::{
    Entity as PaperAuthorEntity,
    Model as PaperAuthor,
    ActiveModel as PaperAuthorActiveModel,
    Column as PaperAuthorColumn,
};

pub use category::{
    Entity as CategoryEntity,
    Model as Category,
    Column as CategoryColumn,
};

pub use profile::{
    Entity as ProfileEntity,
    Model as Profile,
    ActiveModel as ProfileActiveModel,
    Column as ProfileColumn,
};

pub use review_assignment::{
    Entity as ReviewAssignmentEntity,
    Model as ReviewAssignment,
    ActiveModel as ReviewAssignmentActiveModel,
    Column as ReviewAssignmentColumn,
};

pub use shared_link::{
    Entity as SharedLinkEntity,
    Model as SharedLink,
    ActiveModel as SharedLinkActiveModel,
    Column as SharedLinkColumn,
};

pub use feedback::{
    Entity as FeedbackEntity,
    Model as Feedback,
    ActiveModel as FeedbackActiveModel,
    Column as FeedbackColumn,
};

pub use comment::{
    Entity as CommentEntity,
    Model as Comment,
    ActiveModel as CommentActiveModel,
    Column as CommentColumn,
};

pub use review::{
    Entity as ReviewEntity,
    Model as Review,
    ActiveModel as ReviewActiveModel,
    Column as ReviewColumn,
    Recommendation,
};

pub use paper_like::{
    Entity as PaperLikeEntity,
    Model as PaperLike,
    ActiveModel as PaperLikeActiveModel,
    Column as PaperLikeColumn,
};

pub use notification::{
    Entity as NotificationEntity,
    Model as Notification,
    ActiveModel as NotificationActiveModel,
    Column as NotificationColumn,
    NotificationKind,
};
