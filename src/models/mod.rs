pub mod client;
pub mod duty;
pub mod guard;
pub mod inventory;
pub mod salary;
pub mod user;

pub use client::{Client, CreateClient, UpdateClient};
pub use duty::{
    CreateDutyAssignment, DutyAssignment, DutyStatus, ReassignGuard, UpdateDutyAssignment,
};
pub use guard::{CreateGuard, Guard, GuardStatus, UpdateGuard};
pub use inventory::{
    InventoryChange, InventoryRecord, InventoryStatus, IssueInventory, MarkInventoryLost,
    ReturnInventory, UpdateInventory,
};
pub use salary::{CreateSalaryRecord, SalaryRecord, UpdateSalaryRecord};
pub use user::{LoginRequest, RegisterUser, TokenResponse, User, UserResponse};
