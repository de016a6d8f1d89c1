//! # TUI Components
//!
//! ### Stateless Components (Props-Based Rendering)
//!
//! - `TitleBar`: app name, model, connection state, status or failure banner
//! - `Message`: one transcript entry, styled from its content blocks
//! - `LandingPage`: greeting and prompt suggestions for an empty transcript
//!
//! ### Stateful Components (Event-Driven)
//!
//! - `InputBox`: multi-line text input
//! - `MessageList`: scrollable transcript with layout caching
//! - `Settings`: provider/model/temperature/max-tokens overlay
//!
//! Components receive external data as props, never by reaching into `App`:
//!
//! ```rust,ignore
//! let mut title_bar = TitleBar::new(model_label, state, status, banner, unseen);
//! title_bar.render(frame, area);
//! ```
//!
//! ```text
//! components/
//! ├── mod.rs           (this file)
//! ├── title_bar.rs     (Top status bar)
//! ├── message.rs       (Single message renderer)
//! ├── message_list.rs  (Scrollable message container)
//! ├── input_box.rs     (Text input)
//! ├── landing.rs       (Empty-transcript page)
//! └── settings.rs      (LLM configuration overlay)
//! ```

mod title_bar;
pub use title_bar::TitleBar;

pub mod input_box;
pub mod landing;
pub mod message;
pub mod message_list;
pub mod settings;

pub use input_box::{InputBox, InputEvent};
pub use landing::{LandingEvent, LandingPage, LandingState};
pub use message_list::{MessageList, MessageListState};
pub use settings::{Settings, SettingsEvent, SettingsState};
