//! Jobwatch core: job status, view state, fragment codec, and the job store.
mod bootstrap;
mod effect;
pub mod fragment;
mod job;
mod msg;
mod store;
mod update;
mod view_model;
mod view_state;

pub use bootstrap::{BootstrapError, HostBootstrap, JobRange, Term};
pub use effect::Effect;
pub use fragment::{decode_fragment, encode_fragment, FragmentError, FragmentParams};
pub use job::{
    resolve_status, InconsistentJobRecord, Job, JobId, JobStatus, SortKey, Timestamp,
    UnknownStatus,
};
pub use msg::Msg;
pub use store::{JobPage, JobStore, PagingMode};
pub use update::update;
pub use view_model::{DashboardView, JobRowView};
pub use view_state::{
    format_date, parse_date, ChartPayload, DateRange, FilterPayload, RangePayload, ViewChange,
    ViewState, ViewStatePatch, DATE_FORMAT, DEFAULT_PER_PAGE, DEFAULT_REFRESH_SECONDS,
    DEFAULT_SORT_BY,
};
