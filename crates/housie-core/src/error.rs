// How each failure is presented to the user.

/// UI treatment for an error.
///
/// Nothing is retried automatically; every surface except `Toast` leaves the
/// next step to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Credentials missing or rejected: hand off to the login flow.
    RedirectToLogin,
    /// Transient message; state is unchanged.
    Toast,
    /// Channel is down; show the indicator and offer a retry.
    DisconnectedIndicator,
    /// Round could not be loaded; replace the view with an error and retry.
    FullPageError,
}
