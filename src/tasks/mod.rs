pub mod schedule_loop;
