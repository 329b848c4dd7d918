#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Operator changed a filter, the sort, the page, or the poll interval.
    ViewChanged(crate::ViewStatePatch),
    /// Operator checked or unchecked a job row.
    ToggleSelected(crate::JobId),
    /// Operator cleared every checked row.
    ClearSelection,
    /// Operator asked to restart the checked jobs.
    RestartSelectedClicked,
    /// Operator asked for an immediate refresh.
    RefreshRequested,
    /// Render tick; redraws are batched per tick.
    Tick,
    /// Blank operator input.
    NoOp,
}
