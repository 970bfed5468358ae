pub mod calendar_event;
