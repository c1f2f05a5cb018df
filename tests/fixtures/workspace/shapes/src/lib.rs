pub trait Area {
    fn area(&self) -> u32;
}

pub struct Rectangle {
    pub width: u32,
    pub height: u32,
}

impl Area for Rectangle {
    fn area(&self) -> u32 {
        self.width * self.height
    }
}

impl Rectangle {
    pub fn widen(&mut self, by: u32) {
        self.width = self.width + by;
    }
}
