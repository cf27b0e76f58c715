//! Frame-driven animators for the wheel and the looping participant list.

pub mod frame;
pub mod headless;
pub mod scroll;
pub mod wheel;

pub use self::frame::{FrameScheduler, FrameToken, ManualFrameScheduler, TokioFrameScheduler};
pub use self::headless::{HeadlessListSurface, HeadlessWheelSurface, ListFrame};
pub use self::scroll::{ListRow, ListScroller, ScrollError, ScrollOutcome, ScrollSurface};
pub use self::wheel::{WheelAnimator, WheelSurface};
