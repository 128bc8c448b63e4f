//! Models module for the academic operations engine
//!
//! This module contains the data structures used to represent students,
//! fees, enrollments, academic records and timetabling in the database.

pub mod academic_models;

// Re-export commonly used types for convenience
pub use academic_models::{
    AcademicRecord, AcademicRecordStatus, ClassType, Course, Enrollment, EnrollmentStatus,
    FeeComponent, FeeLineItem, Notification, Payment, PaymentStatus, Programme,
    RegistrationPeriod, Student, Term, TimetableEntry,
};
