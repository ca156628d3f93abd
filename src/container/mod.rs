//! Container image build and publish boundary

mod builder;
pub mod daemon;
mod image;
mod publisher;

pub use builder::{BuildError, DockerCliBuilder, ImageBuilder};
pub use image::{image_tag, ImageRef};
pub use publisher::{EcrPublisher, ImagePublisher, PublishError};
