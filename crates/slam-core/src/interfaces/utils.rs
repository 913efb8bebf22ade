use crate::interfaces::native_interface;
use crate::native::strings::from_native;

/// Virtual table layout of `SteamUtils005`.
pub mod slots {
    use std::ffi::c_char;

    use crate::native::vtable::{Slot, member_fn};

    pub type GetConnectedUniverseFn = member_fn!(fn() -> i32);
    pub type GetIpCountryFn = member_fn!(fn() -> *const c_char);
    pub type GetImageSizeFn = member_fn!(fn(i32, *mut u32, *mut u32) -> u8);
    pub type GetImageRgbaFn = member_fn!(fn(i32, *mut u8, i32) -> u8);
    pub type GetAppIdFn = member_fn!(fn() -> u32);

    pub const GET_CONNECTED_UNIVERSE: Slot<GetConnectedUniverseFn> =
        Slot::new(2, "GetConnectedUniverse");
    pub const GET_IP_COUNTRY: Slot<GetIpCountryFn> = Slot::new(4, "GetIPCountry");
    pub const GET_IMAGE_SIZE: Slot<GetImageSizeFn> = Slot::new(5, "GetImageSize");
    pub const GET_IMAGE_RGBA: Slot<GetImageRgbaFn> = Slot::new(6, "GetImageRGBA");
    pub const GET_APP_ID: Slot<GetAppIdFn> = Slot::new(9, "GetAppID");

    pub const COUNT: usize = 10;
}

native_interface!(
    /// Client-wide utilities, including the running app id.
    SteamUtils005,
    "SteamUtils005"
);

impl SteamUtils005 {
    pub fn get_connected_universe(&self) -> i32 {
        let f = self.vtable.function(&slots::GET_CONNECTED_UNIVERSE);
        // SAFETY: slot signature per the SteamUtils005 layout.
        unsafe { f(self.vtable.object()) }
    }

    /// Two letter country code of the user's IP.
    pub fn get_ip_country(&self) -> Option<String> {
        let f = self.vtable.function(&slots::GET_IP_COUNTRY);
        // SAFETY: as above.
        unsafe { from_native(f(self.vtable.object())) }
    }

    /// Width and height of a client-side image.
    pub fn get_image_size(&self, image: i32) -> Option<(u32, u32)> {
        let (mut width, mut height) = (0u32, 0u32);
        let f = self.vtable.function(&slots::GET_IMAGE_SIZE);
        // SAFETY: as above; both out-slots are valid for the call.
        let ok = unsafe { f(self.vtable.object(), image, &mut width, &mut height) };
        (ok != 0).then_some((width, height))
    }

    /// RGBA pixels of a client-side image, 4 bytes per pixel.
    pub fn get_image_rgba(&self, image: i32) -> Option<Vec<u8>> {
        let (width, height) = self.get_image_size(image)?;
        let size = (width as usize) * (height as usize) * 4;
        let native_size = i32::try_from(size).ok()?;
        let mut pixels = vec![0u8; size];
        let f = self.vtable.function(&slots::GET_IMAGE_RGBA);
        // SAFETY: as above; `pixels` holds exactly `native_size` bytes.
        let ok = unsafe { f(self.vtable.object(), image, pixels.as_mut_ptr(), native_size) };
        (ok != 0).then_some(pixels)
    }

    /// Id of the app the client believes is running in this process.
    pub fn get_app_id(&self) -> u32 {
        let f = self.vtable.function(&slots::GET_APP_ID);
        // SAFETY: as above.
        unsafe { f(self.vtable.object()) }
    }
}
