mod local_manager_test;
mod xid_recovery_test;
