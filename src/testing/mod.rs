//! Testing utilities shared by unit tests and the integration tests
//!
//! - [`fixtures`] - Pre-built settings, profiles and orchestrators
//! - [`requests`] - Request builders for the login routes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use justdone_auth::testing::TestFixtures;
//!
//! let settings = TestFixtures::settings_with_endpoints("http://127.0.0.1:1234");
//! let orchestrator = TestFixtures::orchestrator(&settings);
//! ```

pub mod fixtures;
pub mod requests;

pub use fixtures::TestFixtures;
pub use requests::{location, response_cookie, RequestBuilder};

/// Common test constants
pub mod constants {
    /// Session signing secret used by every fixture
    pub const TEST_SESSION_SECRET: &str = "test-session-secret-for-unit-tests";

    pub const TEST_EMAIL: &str = "test@example.com";

    pub const TEST_USER_NAME: &str = "Test User";

    /// Native provider id used in fixture profiles
    pub const TEST_PROVIDER_ID: &str = "123456789";

    pub const TEST_GOOGLE_CLIENT_ID: &str = "test-google-client";
    pub const TEST_GITHUB_CLIENT_ID: &str = "test-github-client";
}
