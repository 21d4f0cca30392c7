mod mock_backend;
mod workflow_tests;
