//! VirtualBox backend for vmfleet
//!
//! Drives a local VirtualBox installation through the `VBoxManage`
//! CLI. Fleet machines are defined by cloning a registered base image;
//! networking, resource caps and shared folders are applied with
//! `modifyvm` / `sharedfolder`, and guest scripts run through
//! `guestcontrol`.

pub mod driver;
pub mod vboxmanage;

pub use driver::VirtualBoxDriver;
pub use vboxmanage::Vboxmanage;
