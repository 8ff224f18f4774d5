mod scheduler;
mod work_set;
