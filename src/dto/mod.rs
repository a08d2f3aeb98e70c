pub mod rate_limit_dto;
