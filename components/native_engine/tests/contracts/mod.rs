//! Contract tests for native_engine
