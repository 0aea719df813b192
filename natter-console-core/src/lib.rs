//! Core library for the natter console: service models, argument building,
//! view routing, render models, polling and the session token store.

pub mod command;
mod error;
mod models;
pub mod render;
mod session;
pub mod sync;
pub mod view;

pub use command::{build_args, BasicOptions, CommandMode, DEFAULT_FORWARD_METHOD, FORWARD_METHODS};
pub use error::{ConsoleError, Result};
pub use models::{
    Ack, AuthCheck, Group, GroupCreated, GroupList, IyuuConfig, IyuuConfigEnvelope, IyuuSchedule,
    IyuuUpdateRequest, LoginResponse, MoveServiceRequest, SaveGroupRequest, SaveTemplateRequest,
    Service, ServiceEnvelope, ServiceList, ServiceState, StartRequest, StartResponse, Template,
    TemplateList, TemplateSaved, ToolCheck, VersionInfo,
};
pub use session::{TokenStore, TOKEN_KEY};
pub use sync::{CurrentService, PollingConfig, PollingSynchronizer};
pub use view::{Panel, ViewState};
