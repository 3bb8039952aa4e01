//! Device module - Simulated bootloader devices
//!
//! A device is an identity (node id and response address) plus a static
//! attribute table. Nothing in the table changes after construction.

use serde::{Deserialize, Serialize};

use crate::protocol::response_address;

/// Base values of the four unique id words; each is offset by the node id
pub const UID_BASE: [u32; 4] = [0x1111_1111, 0x2222_2222, 0x3333_3333, 0x4444_4444];

/// Attributes a device can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    BootloaderVersion,
    BootloaderCrc,
    VendorId,
    ProductId,
    ProductionDate,
    Uid1,
    Uid2,
    Uid3,
    Uid4,
    FlashStartAddr,
    FlashPageSize,
    FlashNumPages,
    AppPageIdx,
    AppCrc,
}

/// Configurable attribute defaults shared by every simulated device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceProfile {
    /// Bootloader version (0x00MMmmpp)
    pub bootloader_version: u32,
    /// Static stand-in for the bootloader CRC
    pub bootloader_crc: u32,
    /// Vendor id
    pub vendor_id: u32,
    /// Product id
    pub product_id: u32,
    /// Production date (0xYYYYMMDD)
    pub production_date: u32,
    /// First address of the flash
    pub flash_start_addr: u32,
    /// Flash page size in bytes
    pub flash_page_size: u32,
    /// Number of pages, bootloader area included
    pub flash_num_pages: u32,
    /// First page of the application area
    pub app_page_idx: u32,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            bootloader_version: 0x0001_0203,
            bootloader_crc: 0xDEAD_BEEF,
            vendor_id: 0x0000_0042,
            product_id: 0x0000_1337,
            production_date: 0x2025_0101,
            flash_start_addr: 0x0800_0000,
            flash_page_size: 0x0000_0400,
            flash_num_pages: 0x0000_0040,
            app_page_idx: 0x0000_0008,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeTable {
    bootloader_version: u32,
    bootloader_crc: u32,
    vendor_id: u32,
    product_id: u32,
    production_date: u32,
    uid: [u32; 4],
    flash_start_addr: u32,
    flash_page_size: u32,
    flash_num_pages: u32,
    app_page_idx: u32,
    app_crc: u32,
}

/// One simulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    node_id: u8,
    response_address: u32,
    table: AttributeTable,
}

impl Device {
    /// Create a device from a profile. The uid words are derived from the
    /// node id so devices in one run never share an identity.
    pub fn new(node_id: u8, profile: &DeviceProfile) -> Self {
        let uid = UID_BASE.map(|base| base.wrapping_add(u32::from(node_id)));

        Self {
            node_id,
            response_address: response_address(node_id),
            table: AttributeTable {
                bootloader_version: profile.bootloader_version,
                bootloader_crc: profile.bootloader_crc,
                vendor_id: profile.vendor_id,
                product_id: profile.product_id,
                production_date: profile.production_date,
                uid,
                flash_start_addr: profile.flash_start_addr,
                flash_page_size: profile.flash_page_size,
                flash_num_pages: profile.flash_num_pages,
                app_page_idx: profile.app_page_idx,
                app_crc: 0,
            },
        }
    }

    pub fn with_defaults(node_id: u8) -> Self {
        Self::new(node_id, &DeviceProfile::default())
    }

    pub fn node_id(&self) -> u8 {
        self.node_id
    }

    pub fn response_address(&self) -> u32 {
        self.response_address
    }

    /// Look up a single attribute value
    pub fn attribute(&self, attribute: Attribute) -> u32 {
        let t = &self.table;
        match attribute {
            Attribute::BootloaderVersion => t.bootloader_version,
            Attribute::BootloaderCrc => t.bootloader_crc,
            Attribute::VendorId => t.vendor_id,
            Attribute::ProductId => t.product_id,
            Attribute::ProductionDate => t.production_date,
            Attribute::Uid1 => t.uid[0],
            Attribute::Uid2 => t.uid[1],
            Attribute::Uid3 => t.uid[2],
            Attribute::Uid4 => t.uid[3],
            Attribute::FlashStartAddr => t.flash_start_addr,
            Attribute::FlashPageSize => t.flash_page_size,
            Attribute::FlashNumPages => t.flash_num_pages,
            Attribute::AppPageIdx => t.app_page_idx,
            Attribute::AppCrc => t.app_crc,
        }
    }

    /// Full 128-bit unique id, most significant word first
    pub fn uid(&self) -> u128 {
        self.table
            .uid
            .iter()
            .rev()
            .fold(0u128, |acc, word| (acc << 32) | u128::from(*word))
    }

    /// Total flash size in bytes
    pub fn flash_size(&self) -> u64 {
        u64::from(self.table.flash_page_size) * u64::from(self.table.flash_num_pages)
    }

    /// Bytes reserved for the bootloader in front of the application
    pub fn bootloader_size(&self) -> u64 {
        u64::from(self.table.flash_page_size) * u64::from(self.table.app_page_idx)
    }
}
