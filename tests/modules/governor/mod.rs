//! governor 模块测试
