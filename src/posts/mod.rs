mod forms;
mod models;
mod routes;
mod views;

pub use forms::{CommentForm, PostEditor, PostForm};
pub use models::{Comment, Feed, Follow, Group, NewComment, NewGroup, NewPost, Post, PostChanges};
pub use routes::routes;
