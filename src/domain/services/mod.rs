pub mod error_mapper;
pub mod mock_gateway;
pub mod order_gateway;
pub mod orders;
pub mod reference_number;
pub mod token_manager;
