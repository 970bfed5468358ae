pub mod gemini_service;
pub mod schedule_parser;
