//! Service and network tests
